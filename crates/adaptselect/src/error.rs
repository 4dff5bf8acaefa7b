use crate::Modality;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("No candidate models for modality '{0}'")]
    NoCandidates(Modality),
}
