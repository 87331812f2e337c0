//! UART transport for the configuration protocol.
//!
//! The ESP-IDF UART driver owns the FIFOs and interrupts, so this adapter
//! only moves bytes: [`UartPort::pump_rx`] copies whatever arrived into the
//! receive ring, and the [`SerialTx`] impl hands one byte at a time to the
//! driver's transmit buffer.  Because the driver buffers internally, a
//! byte is "complete" as soon as it is accepted and the main loop can
//! drain the outbound ring in one go.
//!
//! The simulation backend keeps both directions in memory.

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::app::ports::SerialTx;
#[cfg(target_os = "espidf")]
use crate::error::Error;
use crate::error::Result;
use crate::ring::Producer;
use crate::serial::TxDrain;

#[cfg(target_os = "espidf")]
const DRIVER_BUFFER: i32 = 256;

/// Bytes moved per `pump_rx` read.
const RX_CHUNK: usize = 32;

pub struct UartPort {
    #[cfg(target_os = "espidf")]
    port: uart_port_t,
    #[cfg(not(target_os = "espidf"))]
    inbound: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    outbound: Vec<u8>,
}

impl UartPort {
    /// Install the driver at the configured baud rate, 8N1, no flow control.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self> {
        use crate::config::UART_BAUD;
        use crate::pins;

        let port = pins::UART_PORT;
        let cfg = uart_config_t {
            baud_rate: UART_BAUD as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once from the main task before the loop starts;
        // cfg outlives the call and the driver copies what it needs.
        unsafe {
            let ret = uart_param_config(port, &cfg);
            if ret != ESP_OK { return Err(Error::Serial(ret)); }
            let ret = uart_set_pin(port, pins::UART_TX_GPIO, pins::UART_RX_GPIO, -1, -1);
            if ret != ESP_OK { return Err(Error::Serial(ret)); }
            let ret = uart_driver_install(
                port,
                DRIVER_BUFFER,
                DRIVER_BUFFER,
                0,
                core::ptr::null_mut(),
                0,
            );
            if ret != ESP_OK { return Err(Error::Serial(ret)); }
        }
        info!("uart: port {} @ {} baud", port, UART_BAUD);
        Ok(Self { port })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self> {
        log::info!("uart(sim): in-memory loopback");
        Ok(Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
        })
    }

    /// Move received bytes into the receive ring without blocking.
    ///
    /// Reads no more than the ring can take; the rest stays in the driver
    /// for a later pass.  Returns how many bytes were moved.
    pub fn pump_rx<const N: usize>(&mut self, rx: &mut Producer<'_, N>) -> usize {
        let mut buf = [0u8; RX_CHUNK];
        let room = N.saturating_sub(rx.len()).min(RX_CHUNK);
        if room == 0 {
            return 0;
        }
        let n = self.read_available(&mut buf[..room]);
        rx.push_slice(&buf[..n])
    }

    /// Hand every queued reply byte to the driver.
    pub fn pump_tx<const N: usize>(&mut self, drain: &TxDrain<'_, N>) {
        while drain.is_sending() {
            drain.on_transmit_complete(self);
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        // SAFETY: buf is valid for buf.len() bytes; a zero tick timeout
        // makes the call non-blocking.
        let n = unsafe { uart_read_bytes(self.port, buf.as_mut_ptr() as *mut _, buf.len() as u32, 0) };
        n.max(0) as usize
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        n
    }

    /// Queue bytes as if they had arrived on the wire.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Take everything written so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn take_written(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.outbound)
    }
}

impl SerialTx for UartPort {
    #[cfg(target_os = "espidf")]
    fn write_byte(&mut self, byte: u8) {
        // SAFETY: one byte from the stack; the driver copies it into its
        // transmit ring before returning.
        unsafe { uart_write_bytes(self.port, (&raw const byte).cast(), 1) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_byte(&mut self, byte: u8) {
        self.outbound.push(byte);
    }
}
