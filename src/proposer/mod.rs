//! Move proposers (C9-C10): draw a candidate [`crate::moves::GraphMove`] or
//! [`crate::moves::LabelMove`] and report the log Hastings correction for
//! it, for the Metropolis accept/reject step in an external MCMC driver.

pub mod edge;
pub mod label;
pub mod nested_label;
