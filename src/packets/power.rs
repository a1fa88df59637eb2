//! Power report decoding: bit-packed fixed-point telemetry.

use log::warn;

/// Decoded optimizer telemetry from a `POWER_REPORT` (opcode `0x31`)
/// embedded packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReport {
    /// Input voltage, volts.
    pub v_in: f64,
    /// Output voltage, volts.
    pub v_out: f64,
    /// Duty cycle, percent (0-100).
    pub duty_cycle: f64,
    /// Input current, amperes.
    pub current_in: f64,
    /// Temperature, degrees Celsius.
    pub temperature: f64,
    /// Slot counter; a change signals a genuinely new sample.
    pub slot: u16,
    /// Received signal strength, if the data was long enough to carry it.
    pub rssi: Option<u8>,
    /// `v_in * current_in`, watts.
    pub power: f64,
}

/// Decode a power report's `data` bytes. Returns `None` (after a warning)
/// if `data` is too short to hold the fixed fields.
pub(crate) fn decode_power_report(data: &[u8]) -> Option<PowerReport> {
    if data.len() < 12 {
        warn!("power report data too short ({} bytes, need 12), dropping", data.len());
        return None;
    }

    let vin_raw = ((data[0] as u16) << 4) | ((data[1] as u16 & 0xF0) >> 4);
    let v_in = vin_raw as f64 * 0.05;

    let vout_raw = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;
    let v_out = vout_raw as f64 * 0.10;

    let duty_cycle = data[3] as f64 * (100.0 / 255.0);

    let cur_raw = ((data[4] as u16) << 4) | ((data[5] as u16 & 0xF0) >> 4);
    let current_in = cur_raw as f64 * 0.005;

    let temp_raw = ((data[5] as u16 & 0x0F) << 8) | data[6] as u16;
    let temperature = temp_raw as f64 * 0.1;

    // Bytes 7..10 are reserved.
    let slot = u16::from_be_bytes([data[10], data[11]]);
    let rssi = data.get(12).copied();

    Some(PowerReport {
        v_in,
        v_out,
        duty_cycle,
        current_in,
        temperature,
        slot,
        rssi,
        power: v_in * current_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_spec_worked_example() {
        let mut data = [0u8; 13];
        data[0] = 0x7D;
        data[1] = 0x00;
        data[2] = 0x00;
        data[3] = 0xFF;
        data[4] = 0x64;
        data[5] = 0x00;
        data[6] = 0x00;
        data[10] = 0x00;
        data[11] = 0x05;
        data[12] = 0x7B;

        let r = decode_power_report(&data).unwrap();
        assert!((r.v_in - 100.00).abs() < 1e-9);
        assert!((r.duty_cycle - 100.0).abs() < 1e-9);
        assert!((r.current_in - 8.000).abs() < 1e-9);
        assert_eq!(r.slot, 5);
        assert_eq!(r.rssi, Some(123));
        assert!((r.power - 800.00).abs() < 1e-6);
    }

    #[test]
    fn twelve_bytes_is_accepted_without_rssi() {
        let data = [0u8; 12];
        let r = decode_power_report(&data).unwrap();
        assert_eq!(r.rssi, None);
    }

    #[test]
    fn eleven_bytes_is_rejected() {
        let data = [0u8; 11];
        assert!(decode_power_report(&data).is_none());
    }

    #[test]
    fn packs_voltage_nibbles_correctly() {
        // v_in occupies data[0] (high byte) and the top nibble of data[1].
        // v_out occupies the low nibble of data[1] and data[2].
        let mut data = [0u8; 12];
        data[0] = 0xAB;
        data[1] = 0xC1; // vin low nibble = 0xC, vout high nibble = 0x1
        data[2] = 0x23;
        let r = decode_power_report(&data).unwrap();
        let vin_raw = (0xABCu16) as f64;
        let vout_raw = (0x123u16) as f64;
        assert!((r.v_in - vin_raw * 0.05).abs() < 1e-9);
        assert!((r.v_out - vout_raw * 0.10).abs() < 1e-9);
    }
}
