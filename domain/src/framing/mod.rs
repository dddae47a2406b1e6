//! Framing profile
//!
//! A small structured description of the cultural/epistemic stance of a
//! request. It is derived once per turn and read by every later stage to
//! bias tone; it never blocks the pipeline.

pub mod profile;

pub use profile::{
    AudienceType, AuthoritySource, CorrectionTolerance, FramingDomain, FramingIntent,
    FramingProfile,
};
