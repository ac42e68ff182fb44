use ratatui::layout::Rect;
use tokio::sync::broadcast;

/// 终端里的一次鼠标点击
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub column: u16,
    pub row: u16,
}

/// 屏幕矩形（搜索框 + 下拉框）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && (column as u32) < self.x as u32 + self.width as u32
            && (row as u32) < self.y as u32 + self.height as u32
    }

    pub fn union(self, other: Region) -> Region {
        if self.width == 0 || self.height == 0 {
            return other;
        }
        if other.width == 0 || other.height == 0 {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Region {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

impl From<Rect> for Region {
    fn from(r: Rect) -> Self {
        Region {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

/// 全局点击广播
///
/// 订阅者就是"文档级监听器"：订阅即安装，丢弃 `Receiver` 即移除。
#[derive(Clone)]
pub struct DismissBus {
    tx: broadcast::Sender<PointerEvent>,
}

impl DismissBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn publish(&self, evt: PointerEvent) {
        // 没有监听器时 send 返回 Err，属于正常情况
        let _ = self.tx.send(evt);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PointerEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DismissBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_bounds_are_half_open() {
        let r = Region {
            x: 10,
            y: 2,
            width: 5,
            height: 3,
        };
        assert!(r.contains(10, 2));
        assert!(r.contains(14, 4));
        assert!(!r.contains(15, 4));
        assert!(!r.contains(12, 5));
        assert!(!r.contains(9, 3));
    }

    #[test]
    fn union_covers_input_and_overlay() {
        let input = Region {
            x: 20,
            y: 0,
            width: 40,
            height: 3,
        };
        let overlay = Region {
            x: 20,
            y: 3,
            width: 50,
            height: 10,
        };
        let both = input.union(overlay);
        assert_eq!(
            both,
            Region {
                x: 20,
                y: 0,
                width: 50,
                height: 13
            }
        );
        assert_eq!(input.union(Region::default()), input);
    }

    #[test]
    fn listener_count_tracks_subscriptions() {
        let bus = DismissBus::new();
        assert_eq!(bus.listener_count(), 0);
        let rx = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);
        drop(rx);
        assert_eq!(bus.listener_count(), 0);
        bus.publish(PointerEvent { column: 0, row: 0 });
    }
}
