pub mod amqp;
pub mod messages;
