mod common;
mod metrics;
mod view;
