use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("document {index} is invalid")]
    Invalid {
        index: usize,
        #[source]
        source: Box<DocumentError>,
    },
}
