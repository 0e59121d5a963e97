//! Producer implementations.

pub mod event_scalars;
pub mod hlt;
pub mod identification;
pub mod valid_objects;

pub use event_scalars::EventScalarProducer;
pub use hlt::HltProducer;
pub use identification::{IdPredicate, IdTier, JetId, JetIdVersion};
pub use valid_objects::{
    AdditionalCriteria, LeptonCleaning, ObjectCapability, ValidElectronsProducer, ValidJetsProducer,
    ValidMuonsProducer, ValidObjectsProducer, ValidTausProducer,
};
