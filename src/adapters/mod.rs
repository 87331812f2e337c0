//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                 |
//! |------------|--------------|-----------------------------|
//! | `log_sink` | EventSink    | Developer console log       |
//! | `nvs`      | StoragePort  | NVS blob / in-memory image  |
//! | `uart`     | SerialTx     | ESP-IDF UART driver         |

pub mod log_sink;
pub mod nvs;
pub mod uart;
