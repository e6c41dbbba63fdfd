pub mod domain;
pub mod ports;

pub use domain::{
    ChatMessage, ChatRole, NewSession, NewTopic, PopulatedSession, ProgressSummary, Resource,
    Session, Topic, TopicStatus, User, UserCredentials,
};
pub use ports::{
    DatabaseService, PortError, PortResult, StudyAssistantService, UpstreamError, UpstreamResult,
};
