pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Extensions accepted as gallery reference photos.
pub const REFERENCE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Designated frontal reference inside a gallery person folder.
pub const FRONTAL_FILE_NAME: &str = "frontal.jpg";

pub const FACE_FILE_PREFIX: &str = "face_";

/// Sentinel identity name for unmatched faces.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Builds the sequential file name for the `index`-th persisted face.
pub fn face_file_name(index: usize) -> String {
    format!("{FACE_FILE_PREFIX}{index:04}.jpg")
}
