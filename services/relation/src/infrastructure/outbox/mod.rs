mod worker;

pub use worker::OutboxWorker;
