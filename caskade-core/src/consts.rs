pub const TICKET_GRANTING_TICKET_PREFIX: &str = "TGC";
pub const SERVICE_TICKET_PREFIX: &str = "ST";
