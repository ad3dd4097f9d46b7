// Task-Modul: Hintergrund-Tasks neben dem Supervisor
//
// Der Supervisor selbst läuft in main(). Hier laufen nur die Netzwerk-
// Stacks und der DHCP-Server des Access Points.

pub mod dhcp;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use dhcp::dhcp_server_task;
pub use wifi::net_task;
