use std::fmt;

/// Where the node is in the processing of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PipelineStage {
    Idle = 0,
    Splitting = 1,
    Correcting = 2,
    Estimating = 3,
    Fusing = 4,
    Publishing = 5,
}

impl PipelineStage {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Splitting,
            2 => Self::Correcting,
            3 => Self::Estimating,
            4 => Self::Fusing,
            5 => Self::Publishing,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Splitting => "splitting",
            Self::Correcting => "correcting",
            Self::Estimating => "estimating",
            Self::Fusing => "fusing",
            Self::Publishing => "publishing",
        };
        f.write_str(name)
    }
}
