mod common;
mod plugin_socket;
