// Communication channels lock-free

use crate::messaging::command::ClickCommand;
use ringbuf::{HeapRb, traits::Split};

pub type ClickProducer = ringbuf::HeapProd<ClickCommand>;
pub type ClickConsumer = ringbuf::HeapCons<ClickCommand>;

/// SPSC queue feeding click commands into the audio callback
pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ClickCommand>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::command::ClickKind;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_click_channel_order() {
        let (mut tx, mut rx) = create_click_channel(4);

        assert!(tx.try_push(ClickCommand::new(ClickKind::AccentHigh, 1.0)).is_ok());
        assert!(tx.try_push(ClickCommand::new(ClickKind::Blip, 0.5)).is_ok());

        assert_eq!(rx.try_pop().map(|c| c.kind), Some(ClickKind::AccentHigh));
        assert_eq!(rx.try_pop().map(|c| c.kind), Some(ClickKind::Blip));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_click_channel_full() {
        let (mut tx, _rx) = create_click_channel(1);

        assert!(tx.try_push(ClickCommand::new(ClickKind::Tick, 1.0)).is_ok());
        assert!(tx.try_push(ClickCommand::new(ClickKind::Tick, 1.0)).is_err());
    }
}
