//! Plan statistics, traced after bucket planning.

use log::trace;

#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SemiSortStats {
    pub n: usize,
    pub num_samples: usize,
    pub heavy_buckets: usize,
    pub light_buckets: usize,
    /// Total slots in the working array, including the tail slack.
    pub slots: usize,
}

impl SemiSortStats {
    pub fn load_factor(&self) -> f64 {
        if self.slots == 0 {
            0.0
        } else {
            self.n as f64 / self.slots as f64
        }
    }

    pub(crate) fn log(&self) {
        trace!("        keys: {:>10}", self.n);
        trace!("     samples: {:>10}", self.num_samples);
        trace!(" heavy bckts: {:>10}", self.heavy_buckets);
        trace!(" light bckts: {:>10}", self.light_buckets);
        trace!("       slots: {:>10}", self.slots);
        trace!("   real load: {:>10.4}", self.load_factor());
    }
}
