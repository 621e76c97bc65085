#![forbid(unsafe_code)]

//! The acquisition stages, in pipeline order.

pub mod download;
pub mod metadata;
pub mod naming;
pub mod persist;

pub use download::DownloadVideo;
pub use metadata::{MaskMetadata, mask_metadata};
pub use naming::{CreateOriginalFilename, unique_output_path};
pub use persist::StoreParams;

use crate::pipeline::Pipeline;
use crate::tools::Toolchain;
use crate::watermark::WatermarkStage;

/// Appends mask-metadata, filename synthesis, download and persistence, plus
/// the watermark overlay after the download when `watermark` is set.
pub fn acquisition_stages<'a>(
    pipeline: Pipeline<'a>,
    toolchain: &Toolchain,
    watermark: bool,
) -> Pipeline<'a> {
    let pipeline = pipeline
        .with_stage(MaskMetadata::new(toolchain.clone()))
        .with_stage(CreateOriginalFilename)
        .with_stage(DownloadVideo::new(toolchain.clone()));
    let pipeline = if watermark {
        pipeline.with_stage(WatermarkStage::new(toolchain.clone()))
    } else {
        pipeline
    };
    pipeline.with_stage(StoreParams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{self, Parameters};

    fn url_only() -> Pipeline<'static> {
        Pipeline::new(Parameters::new().with(params::URL, "https://example.com/v1")).unwrap()
    }

    #[test]
    fn acquisition_order_without_watermark() {
        let pipeline = acquisition_stages(url_only(), &Toolchain::default(), false);
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "mask_metadata",
                "create_original_filename",
                "download_video",
                "store_params_as_json"
            ]
        );
    }

    #[test]
    fn watermark_runs_between_download_and_persistence() {
        let pipeline = acquisition_stages(url_only(), &Toolchain::default(), true);
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "mask_metadata",
                "create_original_filename",
                "download_video",
                "add_watermark",
                "store_params_as_json"
            ]
        );
    }
}
