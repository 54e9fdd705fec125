//! 제출 순서를 보존하는 pending action 큐

use std::collections::VecDeque;
use std::time::SystemTime;

use ironscope_core::action::{ModelAction, PendingAction};

/// FIFO 변경 의도 큐
///
/// 순번은 큐 인스턴스 단위로 1부터 단조 증가하며, `clear` 후에도 재사용되지 않습니다.
#[derive(Debug)]
pub struct ActionQueue {
    next_seq: u64,
    items: VecDeque<PendingAction>,
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            items: VecDeque::new(),
        }
    }

    /// 액션에 순번을 부여해 뒤에 넣고 순번을 반환합니다.
    pub fn push(&mut self, action: ModelAction) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(PendingAction {
            seq,
            action,
            enqueued_at: SystemTime::now(),
        });
        seq
    }

    /// 모든 액션을 제출 순서대로 꺼냅니다.
    pub fn drain(&mut self) -> Vec<PendingAction> {
        self.items.drain(..).collect()
    }

    /// 모든 액션을 버리고 버린 수를 반환합니다.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
