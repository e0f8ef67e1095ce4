use std::path::{Path, PathBuf};

use crate::gallery::domain::gallery::Person;
use crate::shared::frame::Frame;

/// Everything a stage may draw on to produce a frontal view of one face.
pub struct FrontalizeRequest<'a> {
    /// The persisted face crop.
    pub face_path: &'a Path,
    /// The same crop, decoded.
    pub face: &'a Frame,
    /// Gallery entry of the matched identity, if any.
    pub person: Option<&'a Person>,
    /// Where the frontal image must be written.
    pub output_path: &'a Path,
}

/// One strategy in the frontalization fallback chain.
///
/// `Ok(Some(path))` means the stage wrote its result; `Ok(None)` means it
/// does not apply to this face. Either `Ok(None)` or an error passes the
/// face on to the next stage.
pub trait FrontalizationStage: Send {
    /// Short label recorded with the output, e.g. `"mirror"`.
    fn name(&self) -> &'static str;

    fn frontalize(
        &mut self,
        request: &FrontalizeRequest<'_>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>>;
}
