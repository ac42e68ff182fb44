use std::fmt;

/// 请求发出时打上的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 记录"最新意图"的单调序号
///
/// 在途请求不会被真正取消；完成时拿自己的 stamp 与最新意图比较，不一致就丢弃结果。
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发出新请求，它成为最新意图
    pub fn issue(&mut self) -> Stamp {
        self.latest += 1;
        Stamp(self.latest)
    }

    pub fn is_current(&self, stamp: Stamp) -> bool {
        stamp.0 == self.latest
    }

    /// 撤回意图：此前发出的所有请求都变成过期
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
