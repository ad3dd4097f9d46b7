// Web-Modul: Konfigurationsseite
//
// HTML-Datei zur Compile-Zeit einbinden
// Die Datei wird direkt ins Binary eingebettet und in 512-Byte-Chunks
// ausgeliefert (siehe cnc_core::http::send_page)
pub const CONFIG_PAGE: &[u8] = include_bytes!("index.html");
