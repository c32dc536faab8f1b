// src/resolve/banks.rs - Group validated outputs by the timer driving them
use super::ValidatedChannel;
use std::collections::BTreeMap;

/// Outputs sharing one timer, keyed by timer name.
pub type TimerBanks = BTreeMap<String, Vec<ValidatedChannel>>;

/// Partitions channels by timer, each bank ordered by logical index.
/// Input is assumed already validated.
pub fn group_by_timer(channels: &[ValidatedChannel]) -> TimerBanks {
    let mut banks = TimerBanks::new();
    for channel in channels {
        banks
            .entry(channel.timer.clone())
            .or_default()
            .push(channel.clone());
    }
    for bank in banks.values_mut() {
        bank.sort_by_key(|c| c.index);
    }
    banks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::RoutedPin;

    fn channel(index: u32, logical: &str, timer: &str, ch: u8) -> ValidatedChannel {
        let logical: crate::pins::LogicalPin = logical.parse().unwrap();
        ValidatedChannel {
            index,
            logical,
            pin: RoutedPin::primary(logical.to_physical()),
            timer: timer.to_string(),
            channel: ch,
            af: 2,
            complementary: false,
        }
    }

    #[test]
    fn test_banks_sorted_by_index() {
        let channels = vec![
            channel(5, "B04", "TIM3", 1),
            channel(1, "A08", "TIM1", 1),
            channel(4, "B05", "TIM3", 2),
            channel(2, "A09", "TIM1", 2),
        ];
        let banks = group_by_timer(&channels);
        assert_eq!(banks.keys().collect::<Vec<_>>(), vec!["TIM1", "TIM3"]);
        let tim3: Vec<u32> = banks["TIM3"].iter().map(|c| c.index).collect();
        assert_eq!(tim3, vec![4, 5]);
        let total: usize = banks.values().map(Vec::len).sum();
        assert_eq!(total, channels.len());
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_timer(&[]).is_empty());
    }
}
