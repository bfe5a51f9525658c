//! Outbound ports - Interfaces that the application requires from external systems

mod dilemma_port;

pub use dilemma_port::{
    ChoiceScore, DilemmaContext, DilemmaPort, DilemmaPortError, GeneratedDilemma,
    LifeSummaryContext, ScoreRequest,
};
