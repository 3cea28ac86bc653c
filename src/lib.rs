pub mod assertion;
pub mod builder;
pub mod connection;
pub mod error;
pub mod grpc;
pub mod http;
pub mod loader;
pub mod logger;
pub mod report;
pub mod scenario;
pub mod step;
pub mod suite;
pub mod variable;

// Re-export commonly used types
pub use assertion::{
    AnyOf, BodyExpect, Contains, Gt, Gte, Length, Lt, Lte, MatchError, Matcher, Matches, NotEmpty,
    Pattern, SaveEntry,
};
pub use builder::StepBuilder;
pub use connection::{Connection, Protocol};
pub use error::{Error, Result};
pub use grpc::{GrpcConnection, GrpcExpect, GrpcOutcome, GrpcRequest, code_name};
pub use http::{HttpConnection, HttpExpect, HttpRequest};
pub use report::{Failure, FailureScope, SuiteError};
pub use scenario::Scenario;
pub use step::{ExpectSpec, RequestSpec, Step};
pub use suite::Suite;
pub use variable::VarStore;
