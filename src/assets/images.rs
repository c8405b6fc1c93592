//! Incremental image planning

use crate::assets::{collect_files, is_up_to_date};
use crate::core::config::ImageConfig;
use std::path::PathBuf;

/// One image that needs optimizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Default)]
pub struct ImagePlan {
    /// Images whose destination is missing or older than the source
    pub jobs: Vec<ImageJob>,
    pub up_to_date: usize,
}

/// Mirror the source tree onto the output directory and keep only stale images
pub fn plan_images(config: &ImageConfig) -> ImagePlan {
    let mut plan = ImagePlan::default();
    for source in collect_files(&config.source_dir, &config.extensions) {
        let Ok(relative) = source.strip_prefix(&config.source_dir) else {
            continue;
        };
        let dest = config.output_dir.join(relative);
        if is_up_to_date(&source, &dest) {
            plan.up_to_date += 1;
        } else {
            plan.jobs.push(ImageJob { source, dest });
        }
    }
    plan
}
