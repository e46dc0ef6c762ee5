//! Per-light runtime state

use std::time::Duration;

use crate::debounce::Debounce;
use crate::settings::LightSettings;
use crate::stage::NodeId;

/// One live light: its stage node, resolved bag, and show/hide timers.
/// Both timers run the light's own `timing`, independent of every other
/// light.
#[derive(Debug, Clone)]
pub struct Light {
    pub node: NodeId,
    pub bag: LightSettings,
    /// Adopted rather than created this session; the engine keeps a
    /// restore record for these across destroy
    pub preexisting: bool,
    pub show: Debounce,
    pub hide: Debounce,
}

impl Light {
    pub fn new(node: NodeId, bag: LightSettings, preexisting: bool) -> Self {
        let delay = Duration::from_millis(bag.timing_ms() as u64);
        Light {
            node,
            bag,
            preexisting,
            show: Debounce::new(delay),
            hide: Debounce::new(delay),
        }
    }
}
