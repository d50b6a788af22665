/// File suffix of the first raw acquisition file.
pub const ACQUISITION_EXTENSION: &str = "czi";

/// Extension of the canonical project description written by the engine.
pub const PROJECT_EXTENSION: &str = "xml";

/// Extension of the multiresolution container written by the resave stage.
pub const CONTAINER_EXTENSION: &str = "h5";

/// Extension of the converted final-format output.
pub const FINAL_EXTENSION: &str = "ims";

/// Suffix appended to the input file name for the temp working directory.
pub const TEMP_DIR_SUFFIX: &str = "_temp";

/// Suffix appended to the input file name for the kept fused-output directory.
pub const FUSED_DIR_SUFFIX: &str = "_fused";

/// Suffix appended to the project stem for the fused project description.
pub const FUSED_PROJECT_SUFFIX: &str = "_fused";

/// Suffix appended to the input file name for the persisted job summary.
pub const SUMMARY_SUFFIX: &str = "_pipeline_log.txt";

/// First file written by a TIFF fusion (timepoint 0, channel 0). The
/// converter picks up the remaining files from its naming tokens.
pub const FIRST_FUSED_TIFF: &str = "fused_tp_0_ch_0.tif";

/// Minimum correlation for a pairwise link to survive filtering.
pub const MIN_LINK_CORRELATION: f64 = 0.7;

/// Maximum correlation accepted by the link filter.
pub const MAX_LINK_CORRELATION: f64 = 1.0;

/// Relative error threshold of the two-round global optimization.
pub const OPTIMIZATION_RELATIVE_THRESHOLD: f64 = 2.5;

/// Absolute error threshold of the two-round global optimization.
pub const OPTIMIZATION_ABSOLUTE_THRESHOLD: f64 = 3.5;

/// Free memory must exceed this multiple of the (downsampled) artifact size
/// for fusion to run fully in memory.
pub const DEFAULT_IN_MEMORY_MULTIPLIER: f64 = 6.0;

/// Blow-up of one decoded timepoint/channel relative to its share of the
/// compressed artifact.
pub const DEFAULT_WORKING_SET_MULTIPLIER: f64 = 2.0;

/// The working set must stay below `free / DEFAULT_MARGIN_DIVISOR` for the
/// disk-backed strategy to be permitted without confirmation.
pub const DEFAULT_MARGIN_DIVISOR: f64 = 10.0;

/// Estimated container size relative to the raw acquisition file, used before
/// the resave stage has produced a container.
pub const DEFAULT_SOURCE_SIZE_DIVISOR: f64 = 2.0;

/// Number of memory reclamation passes after fusion.
pub const DEFAULT_RECLAIM_PASSES: u32 = 3;

/// Pause between memory reclamation passes, in seconds.
pub const DEFAULT_RECLAIM_PAUSE_SECS: u64 = 10;

/// Difference-of-Gaussian sigma for interest-point detection.
pub const DEFAULT_DOG_SIGMA: f64 = 1.8;

/// Difference-of-Gaussian threshold for interest-point detection.
pub const DEFAULT_DOG_THRESHOLD: f64 = 0.008;

/// Upper bound on interest points kept per view.
pub const DEFAULT_MAX_DETECTIONS: u32 = 3000;

/// Output format tag passed to the converter.
pub const DEFAULT_CONVERTER_FORMAT: &str = "Imaris5";

/// Converter file-naming token for the channel index.
pub const CONVERTER_CHANNEL_TOKEN: &str = "_CH_";

/// Converter file-naming token for the timepoint index.
pub const CONVERTER_TIMEPOINT_TOKEN: &str = "_TP_";

/// Default mail relay for job notifications.
pub const DEFAULT_SMTP_RELAY: &str = "localhost:25";

/// Default sender address for job notifications.
pub const DEFAULT_SMTP_SENDER: &str = "lightsheet@localhost";
