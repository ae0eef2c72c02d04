//! Wire types and client stub for the engine's `proto.SemanticService`,
//! generated from `proto/sentinel.proto`.

#![allow(clippy::all)]

tonic::include_proto!("proto");
