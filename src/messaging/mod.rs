// Messaging - Queues between the host thread and the audio callback

pub mod channels;
pub mod command;
pub mod notification;
