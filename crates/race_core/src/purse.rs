//! Purse distribution seam.

use std::collections::BTreeMap;

use crate::RaceClass;

/// Maps a finished race to payouts by place. Called once per run, after
/// places are final; places without an entry pay nothing.
pub trait PurseTable {
    fn payouts(&self, class: RaceClass, total_purse: f64) -> BTreeMap<u32, f64>;
}

/// Fixed share schedule per race class, paying from 1st place down.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPurseTable;

impl StandardPurseTable {
    pub fn shares(class: RaceClass) -> &'static [f64] {
        match class {
            RaceClass::Maiden | RaceClass::Claiming => &[0.60, 0.20, 0.12, 0.05, 0.03],
            RaceClass::Allowance => &[0.60, 0.20, 0.10, 0.05, 0.03, 0.02],
            RaceClass::Stakes => &[0.55, 0.20, 0.11, 0.06, 0.04, 0.02, 0.02],
        }
    }
}

impl PurseTable for StandardPurseTable {
    fn payouts(&self, class: RaceClass, total_purse: f64) -> BTreeMap<u32, f64> {
        Self::shares(class)
            .iter()
            .zip(1u32..)
            .map(|(share, place)| (place, total_purse * share))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_sum_to_one() {
        for class in [
            RaceClass::Maiden,
            RaceClass::Claiming,
            RaceClass::Allowance,
            RaceClass::Stakes,
        ] {
            let total: f64 = StandardPurseTable::shares(class).iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{class:?} sums to {total}");
        }
    }

    #[test]
    fn payouts_scale_with_purse() {
        let payouts = StandardPurseTable.payouts(RaceClass::Allowance, 51_000.0);
        assert_eq!(payouts.len(), 6);
        assert!((payouts[&1] - 30_600.0).abs() < 1e-6);
        assert!((payouts[&6] - 1_020.0).abs() < 1e-6);
        assert!(!payouts.contains_key(&7));
    }

    #[test]
    fn payouts_decrease_by_place() {
        let payouts = StandardPurseTable.payouts(RaceClass::Stakes, 100_000.0);
        let amounts: Vec<f64> = payouts.values().copied().collect();
        assert!(amounts.windows(2).all(|w| w[0] >= w[1]));
    }
}
