pub mod page_handlers;
pub mod rpc_handlers;
