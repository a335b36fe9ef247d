/// 値から子のキーを導出
pub trait Keyed<K> {
    fn key(&self) -> K;
}

/// キー付きの子を所有するツリー
/// 追加のみ（削除なし）。同じキーで追加すると置き換え
#[derive(Debug, Clone, PartialEq)]
pub struct Tree<K, V> {
    value: V,
    children: Vec<(K, Tree<K, V>)>,
}

impl<K: PartialEq, V> Tree<K, V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// `key` に子を追加して返す
    pub fn add_child_with_key(&mut self, key: K, value: V) -> &mut Tree<K, V> {
        let index = match self.children.iter().position(|(k, _)| *k == key) {
            Some(i) => {
                self.children[i].1 = Tree::new(value);
                i
            }
            None => {
                self.children.push((key, Tree::new(value)));
                self.children.len() - 1
            }
        };
        &mut self.children[index].1
    }

    /// 値のキーで子を追加
    pub fn add_child(&mut self, value: V) -> &mut Tree<K, V>
    where
        V: Keyed<K>,
    {
        let key = value.key();
        self.add_child_with_key(key, value)
    }

    pub fn child(&self, key: &K) -> Option<&Tree<K, V>> {
        self.children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, child)| child)
    }

    pub fn children(&self) -> impl Iterator<Item = &Tree<K, V>> {
        self.children.iter().map(|(_, child)| child)
    }

    pub fn child_keys(&self) -> impl Iterator<Item = &K> {
        self.children.iter().map(|(key, _)| key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &Tree<K, V>)> {
        self.children.iter().map(|(key, child)| (key, child))
    }

    /// 自身を含むノード数
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Tree::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str);

    impl Keyed<char> for Named {
        fn key(&self) -> char {
            self.0.chars().next().unwrap_or('?')
        }
    }

    #[test]
    fn test_add_and_get_child() {
        let mut tree: Tree<&str, u32> = Tree::new(0);
        tree.add_child_with_key("a", 1).add_child_with_key("b", 2);
        tree.add_child_with_key("c", 3);

        assert_eq!(*tree.child(&"a").unwrap().value(), 1);
        assert_eq!(*tree.child(&"a").unwrap().child(&"b").unwrap().value(), 2);
        assert!(tree.child(&"b").is_none());
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let mut tree: Tree<&str, u32> = Tree::new(0);
        tree.add_child_with_key("a", 1).add_child_with_key("x", 9);
        tree.add_child_with_key("a", 2);

        assert_eq!(tree.child_keys().count(), 1);
        let a = tree.child(&"a").unwrap();
        assert_eq!(*a.value(), 2);
        assert!(a.child(&"x").is_none());
    }

    #[test]
    fn test_add_child_uses_key_of_value() {
        let mut tree: Tree<char, Named> = Tree::new(Named("root"));
        tree.add_child(Named("left"));
        tree.add_child(Named("up"));

        let keys: Vec<char> = tree.child_keys().copied().collect();
        assert_eq!(keys, vec!['l', 'u']);
        assert_eq!(tree.child(&'u').unwrap().value(), &Named("up"));
        assert_eq!(tree.children().count(), 2);
    }
}
