//! Declarative Mountebank configuration.
//!
//! This module provides:
//! - `Imposter`: a mock endpoint grouping stubs on one port
//! - `Stub`: predicates plus an ordered list of responses
//! - `Response`, `InjectionResponse`, `Proxy`: what a stub answers with
//! - `Predicate`: which requests a stub applies to
//! - `RecordedRequest`: traffic seen by an imposter
//!
//! Every type serializes to exactly the JSON the Mountebank admin API accepts,
//! and parses back from what it returns.

mod imposter;
mod predicates;
mod recorded;
mod responses;
mod stub;
mod wire;


pub use imposter::{Imposter, ImposterDetail, Protocol};
pub use predicates::{FieldPredicate, Operator, Predicate, RequestFields};
pub use recorded::RecordedRequest;
pub use responses::{
    Behaviors, Body, InjectionResponse, Mode, PredicateGenerator, Proxy, ProxyMode, Response, Wait,
};
pub use stub::{Stub, StubResponse};
