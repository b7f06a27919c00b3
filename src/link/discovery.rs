//! # Device Discovery
//!
//! Ranks scan results for display.
//!
//! ## Ranking
//!
//! 1. A device advertising exactly the printer's name is pinned to the top.
//! 2. Everything else is sorted by estimated distance, nearest first.
//! 3. Devices with no distance estimate go last, in arrival order.
//!
//! Each device appears once; repeat advertisements are ignored.
//!
//! ## Distance Estimate
//!
//! Log-distance fit commonly used for BLE beacons, with a reference power of
//! -59 dBm at one metre:
//!
//! ```text
//! ratio = rssi / tx_power
//! d = ratio^10                        if ratio < 1
//! d = 0.89976 * ratio^7.7095 + 0.111  otherwise
//! ```
//!
//! It is only good for ordering, not for reading off metres.

use std::cmp::Ordering;

use crate::transport::{Advertisement, DeviceId};

/// Calibrated RSSI at one metre
pub const DEFAULT_TX_POWER: f64 = -59.0;

/// Distance in metres from signal strength. `None` when RSSI is 0 (no reading).
pub fn estimate_distance(rssi: f64, tx_power: f64) -> Option<f64> {
    if rssi == 0.0 {
        return None;
    }
    let ratio = rssi / tx_power;
    if ratio < 1.0 {
        Some(ratio.powi(10))
    } else {
        Some(0.89976 * ratio.powf(7.7095) + 0.111)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: i16,
    /// Metres; `None` if unknown
    pub distance: Option<f64>,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<DeviceId>, name: Option<String>, distance: Option<f64>) -> Self {
        Self {
            id: id.into(),
            name,
            rssi: 0,
            distance,
        }
    }

    pub fn from_advertisement(adv: Advertisement) -> Self {
        Self {
            distance: estimate_distance(adv.rssi as f64, DEFAULT_TX_POWER),
            id: adv.id,
            name: adv.name,
            rssi: adv.rssi,
        }
    }

    /// Label for a device list. Unnamed devices show as "Unknown".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Deduplicated scan results in display order.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    preferred_name: String,
    devices: Vec<DiscoveredDevice>,
}

impl DeviceList {
    pub fn new(preferred_name: impl Into<String>) -> Self {
        Self {
            preferred_name: preferred_name.into(),
            devices: Vec::new(),
        }
    }

    fn is_preferred(&self, device: &DiscoveredDevice) -> bool {
        device.name.as_deref() == Some(self.preferred_name.as_str())
    }

    /// Ordering key: pinned first, then nearest. Unknown distance is farthest.
    fn rank(&self, a: &DiscoveredDevice, b: &DiscoveredDevice) -> Ordering {
        let pinned = self.is_preferred(b).cmp(&self.is_preferred(a));
        let da = a.distance.unwrap_or(f64::INFINITY);
        let db = b.distance.unwrap_or(f64::INFINITY);
        pinned.then(da.partial_cmp(&db).unwrap_or(Ordering::Equal))
    }

    /// Insert `device` at its ranked position.
    ///
    /// Returns false if a device with the same id is already listed. Ties
    /// keep arrival order.
    pub fn insert(&mut self, device: DiscoveredDevice) -> bool {
        if self.contains(&device.id) {
            return false;
        }
        let index = self
            .devices
            .iter()
            .position(|d| self.rank(d, &device) == Ordering::Greater)
            .unwrap_or(self.devices.len());
        self.devices.insert(index, device);
        true
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| &d.id == id)
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|d| &d.id == id)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn as_slice(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn to_vec(&self) -> Vec<DiscoveredDevice> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dev(id: &str, name: &str, distance: Option<f64>) -> DiscoveredDevice {
        DiscoveredDevice::new(id, Some(name.to_string()), distance)
    }

    fn distances(list: &DeviceList) -> Vec<Option<f64>> {
        list.as_slice().iter().map(|d| d.distance).collect()
    }

    #[test]
    fn test_sorted_by_distance() {
        let mut list = DeviceList::new("Mini-Printer");
        list.insert(dev("a", "x", Some(3.0)));
        list.insert(dev("b", "y", Some(1.0)));
        list.insert(dev("c", "z", Some(2.0)));
        assert_eq!(distances(&list), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_unknown_distance_last() {
        let mut list = DeviceList::new("Mini-Printer");
        list.insert(dev("u", "unknown", None));
        list.insert(dev("a", "x", Some(3.0)));
        list.insert(dev("b", "y", Some(1.0)));
        assert_eq!(distances(&list), vec![Some(1.0), Some(3.0), None]);
    }

    #[test]
    fn test_name_match_pinned_first() {
        let mut list = DeviceList::new("Mini-Printer");
        list.insert(dev("a", "x", Some(0.5)));
        list.insert(dev("p", "Mini-Printer", Some(9.0)));
        list.insert(dev("b", "y", Some(0.1)));

        assert_eq!(list.as_slice()[0].id, "p");
        assert_eq!(list.as_slice()[1].id, "b");
        assert_eq!(list.as_slice()[2].id, "a");
    }

    #[test]
    fn test_name_match_is_exact() {
        let mut list = DeviceList::new("Mini-Printer");
        list.insert(dev("a", "x", Some(0.5)));
        list.insert(dev("p", "mini-printer", Some(9.0)));
        assert_eq!(list.as_slice()[0].id, "a");
    }

    #[test]
    fn test_dedup_by_id() {
        let mut list = DeviceList::new("Mini-Printer");
        assert!(list.insert(dev("a", "x", Some(2.0))));
        assert!(!list.insert(dev("a", "x", Some(0.1))));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(&"a".to_string()).unwrap().distance, Some(2.0));
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut list = DeviceList::new("Mini-Printer");
        list.insert(dev("first", "x", None));
        list.insert(dev("second", "y", None));
        assert_eq!(list.as_slice()[0].id, "first");
        assert_eq!(list.as_slice()[1].id, "second");
    }

    #[test]
    fn test_distance_estimate() {
        assert_eq!(estimate_distance(0.0, DEFAULT_TX_POWER), None);
        // rssi == tx_power -> ratio 1 -> 0.89976 + 0.111
        let d = estimate_distance(-59.0, DEFAULT_TX_POWER).unwrap();
        assert!((d - 1.01076).abs() < 1e-6);
        // Stronger than reference is closer than a metre
        assert!(estimate_distance(-40.0, DEFAULT_TX_POWER).unwrap() < 1.0);
        // Weaker signals are monotonically farther
        let near = estimate_distance(-70.0, DEFAULT_TX_POWER).unwrap();
        let far = estimate_distance(-90.0, DEFAULT_TX_POWER).unwrap();
        assert!(far > near);
    }

    #[test]
    fn test_from_advertisement() {
        let device = DiscoveredDevice::from_advertisement(Advertisement {
            id: "aa".into(),
            name: None,
            rssi: 0,
        });
        assert_eq!(device.distance, None);
        assert_eq!(device.display_name(), "Unknown");
    }
}
