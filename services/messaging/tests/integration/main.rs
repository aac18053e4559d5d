mod helpers;

mod auth_test;
mod message_test;
