/// 早着を許容する割合（タイマーのジッター吸収）
const EARLY_TOLERANCE: f64 = 0.25;

/// サンプリングを目標レート以下に抑える。
/// 位相は維持（少し遅れても次は遅らせない）
#[derive(Debug, Clone)]
pub struct SampleThrottle {
    interval: f64,
    next_due: Option<f64>,
}

impl SampleThrottle {
    pub fn new(target_fps: f64) -> Self {
        Self {
            interval: 1.0 / target_fps,
            next_due: None,
        }
    }

    /// `now` にサンプルを取るか。受理したら次の枠を予約
    pub fn try_accept(&mut self, now: f64) -> bool {
        let due = match self.next_due {
            None => {
                self.next_due = Some(now + self.interval);
                return true;
            }
            Some(due) => due,
        };
        if now < due - self.interval * EARLY_TOLERANCE {
            return false;
        }
        self.next_due = Some(if now - due < self.interval {
            due + self.interval
        } else {
            // 1枠以上遅れたら位相をリセット
            now + self.interval
        });
        true
    }
}
