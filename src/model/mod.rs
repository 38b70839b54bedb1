//! Random-graph models (C7): each couples a prior chain to a graph
//! generator and exposes `sample`/`log_likelihood`/`log_prior`/`log_joint`
//! plus the apply/ratio pair MCMC proposers drive.

pub mod configuration;
pub mod dcsbm;
pub mod erdos_renyi;
pub mod nested_sbm;
pub mod planted_partition;
pub mod sbm;
