pub mod message_bus;
