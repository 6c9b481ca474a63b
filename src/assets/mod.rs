//! Static asset compression.
//!
//! # Data Flow
//! ```text
//! conf/compress.json
//!     → settings.rs (parse into AssetSettings, publish into AssetStore)
//!     → compressor.rs (production only: bundle each group into its dist file)
//!     → templates ask AssetStore for js/css tags
//! ```

pub mod compressor;
pub mod settings;

pub use compressor::{AssetCompressor, BundleCompressor, CompressOptions, CompressReport};
pub use settings::{AssetError, AssetSettings, AssetStore, CompressConfig};
