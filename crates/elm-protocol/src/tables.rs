//! Lookup tables: AT/ST commands, service modes, PIDs, negative responses
//!
//! Descriptions are quick-reference strings, not exhaustive documentation.
//! AT/ST lookups are longest-prefix-first so `ATDPN` wins over `ATDP`.

/// ELM327 AT command quick reference
const AT_COMMANDS: &[(&str, &str)] = &[
    ("AT@1", "Display device description"),
    ("ATAT0", "Adaptive timing off"),
    ("ATAT1", "Adaptive timing auto 1"),
    ("ATAT2", "Adaptive timing auto 2"),
    ("ATCAF0", "CAN automatic formatting off"),
    ("ATCAF1", "CAN automatic formatting on"),
    ("ATCRA", "Set CAN receive address filter"),
    ("ATD", "Set all settings to defaults"),
    ("ATDP", "Describe the current protocol"),
    ("ATDPN", "Describe the current protocol by number"),
    ("ATE0", "Echo off"),
    ("ATE1", "Echo on"),
    ("ATH0", "Headers off"),
    ("ATH1", "Headers on"),
    ("ATI", "Print adapter identification"),
    ("ATL0", "Linefeeds off"),
    ("ATL1", "Linefeeds on"),
    ("ATMA", "Monitor all messages on the bus"),
    ("ATPC", "Protocol close"),
    ("ATRV", "Read adapter supply voltage"),
    ("ATS0", "Printing of spaces off"),
    ("ATS1", "Printing of spaces on"),
    ("ATSH", "Set header for transmitted messages"),
    ("ATSP", "Set protocol (0 = automatic)"),
    ("ATST", "Set response timeout"),
    ("ATWS", "Warm start (soft reset)"),
    ("ATZ", "Full reset"),
];

/// STN11xx/STN22xx ST command quick reference
const ST_COMMANDS: &[(&str, &str)] = &[
    ("STDI", "Print device hardware identification"),
    ("STFAB", "Add a block filter"),
    ("STFAP", "Add a pass filter"),
    ("STFCB", "Clear all block filters"),
    ("STFCP", "Clear all pass filters"),
    ("STI", "Print firmware identification"),
    ("STM", "Monitor the bus using current filters"),
    ("STP", "Set current protocol"),
    ("STPBR", "Set protocol baud rate"),
    ("STPC", "Close the current protocol"),
    ("STPO", "Open the current protocol"),
    ("STSBR", "Switch UART baud rate"),
    ("STSN", "Print device serial number"),
];

/// Longest AT-table key that is a prefix of `line` (already uppercased)
pub fn at_command(line: &str) -> Option<(&'static str, &'static str)> {
    longest_prefix(AT_COMMANDS, line)
}

/// Longest ST-table key that is a prefix of `line` (already uppercased)
pub fn st_command(line: &str) -> Option<(&'static str, &'static str)> {
    longest_prefix(ST_COMMANDS, line)
}

fn longest_prefix(
    table: &'static [(&'static str, &'static str)],
    line: &str,
) -> Option<(&'static str, &'static str)> {
    table
        .iter()
        .filter(|(key, _)| line.starts_with(key))
        .max_by_key(|(key, _)| key.len())
        .copied()
}

/// OBD-II service (mode) descriptions, SAE J1979
pub fn obd_mode(mode: u8) -> Option<&'static str> {
    Some(match mode {
        0x01 => "Show current data",
        0x02 => "Show freeze frame data",
        0x03 => "Show stored DTCs",
        0x04 => "Clear DTCs",
        0x05 => "O2 sensor monitoring",
        0x06 => "Other monitoring",
        0x07 => "Pending DTCs",
        0x08 => "Control on-board component",
        0x09 => "Request vehicle information",
        0x0A => "Permanent DTCs",
        _ => return None,
    })
}

/// UDS/KWP service descriptions, ISO 14229 / ISO 14230
pub fn uds_service(service: u8) -> Option<&'static str> {
    Some(match service {
        0x10 => "Diagnostic session control",
        0x11 => "ECU reset",
        0x14 => "Clear diagnostic information",
        0x19 => "Read DTC information",
        0x22 => "Read data by identifier",
        0x23 => "Read memory by address",
        0x27 => "Security access",
        0x28 => "Communication control",
        0x2E => "Write data by identifier",
        0x31 => "Routine control",
        0x34 => "Request download",
        0x35 => "Request upload",
        0x36 => "Transfer data",
        0x37 => "Request transfer exit",
        0x3E => "Tester present",
        0x85 => "Control DTC setting",
        _ => return None,
    })
}

/// Negative response code descriptions, ISO 14229-1 / ISO 14230-3
pub fn nrc_description(code: u8) -> &'static str {
    match code {
        0x10 => "General reject",
        0x11 => "Service not supported",
        0x12 => "Sub-function not supported",
        0x13 => "Incorrect message length or invalid format",
        0x14 => "Response too long",
        0x21 => "Busy, repeat request",
        0x22 => "Conditions not correct",
        0x23 => "Routine not complete",
        0x24 => "Request sequence error",
        0x25 => "No response from subnet component",
        0x31 => "Request out of range",
        0x33 => "Security access denied",
        0x35 => "Invalid key",
        0x36 => "Exceeded number of attempts",
        0x37 => "Required time delay not expired",
        0x40 => "Download not accepted",
        0x41 => "Improper download type",
        0x42 => "Cannot download to specified address",
        0x43 => "Cannot download number of bytes requested",
        0x50 => "Upload not accepted",
        0x51 => "Improper upload type",
        0x52 => "Cannot upload from specified address",
        0x53 => "Cannot upload number of bytes requested",
        0x70 => "Upload/download not accepted",
        0x71 => "Transfer data suspended",
        0x72 => "General programming failure",
        0x73 => "Wrong block sequence counter",
        0x77 => "Block transfer data checksum error",
        0x78 => "Request received, response pending",
        0x7E => "Sub-function not supported in active session",
        0x7F => "Service not supported in active session",
        0x80 => "Service not supported in active diagnostic session",
        0x81 => "RPM too high",
        0x82 => "RPM too low",
        0x83 => "Engine is running",
        0x84 => "Engine is not running",
        0x85 => "Engine run time too low",
        0x86 => "Temperature too high",
        0x87 => "Temperature too low",
        0x88 => "Vehicle speed too high",
        0x89 => "Vehicle speed too low",
        0x8A => "Throttle/pedal too high",
        0x8B => "Throttle/pedal too low",
        0x8C => "Transmission range not in neutral",
        0x8D => "Transmission range not in gear",
        0x8E => "ISO/SAE reserved",
        0x8F => "Brake switches not closed",
        0x90 => "Shifter lever not in park",
        0x91 => "Torque converter clutch locked",
        0x92 => "Voltage too high",
        0x93 => "Voltage too low",
        0xF1 => "Manufacturer specific condition not correct",
        0xFA..=0xFE => "Manufacturer specific condition not correct",
        _ => "Unknown NRC",
    }
}

/// A mode 01 PID with a value formatter
pub struct PidEntry {
    /// Human-readable parameter name
    pub name: &'static str,
    /// Render the payload bytes as a physical value, if enough are present
    pub format: fn(&[u8]) -> Option<String>,
}

fn fmt_temperature(data: &[u8]) -> Option<String> {
    data.first().map(|&a| format!("{} \u{00B0}C", a as i32 - 40))
}

fn fmt_rpm(data: &[u8]) -> Option<String> {
    match data {
        [a, b, ..] => Some(format!("{} rpm", (((*a as u32) << 8) + *b as u32) / 4)),
        _ => None,
    }
}

fn fmt_speed(data: &[u8]) -> Option<String> {
    data.first().map(|&a| format!("{} km/h", a))
}

fn fmt_percentage(data: &[u8]) -> Option<String> {
    data.first()
        .map(|&a| format!("{:.1} %", a as f64 * 100.0 / 255.0))
}

// Only PIDs with a decoding formula are listed; everything else renders as a
// bare "PID XX".
static PID_TABLE: &[(u8, PidEntry)] = &[
    (0x05, PidEntry { name: "Coolant temperature", format: fmt_temperature }),
    (0x0C, PidEntry { name: "Engine RPM", format: fmt_rpm }),
    (0x0D, PidEntry { name: "Vehicle speed", format: fmt_speed }),
    (0x0F, PidEntry { name: "Intake air temperature", format: fmt_temperature }),
    (0x11, PidEntry { name: "Throttle position", format: fmt_percentage }),
    (0x2F, PidEntry { name: "Fuel level", format: fmt_percentage }),
];

/// Look up the formatter for a mode 01 PID
pub fn pid_entry(pid: u8) -> Option<&'static PidEntry> {
    PID_TABLE.iter().find(|(p, _)| *p == pid).map(|(_, e)| e)
}
