#![allow(non_snake_case)]

pub mod LoginAttempt;
pub mod ServiceTicket;
pub mod TicketGrantingTicket;
pub mod TwoFactorAuthenticator;
pub mod User;
