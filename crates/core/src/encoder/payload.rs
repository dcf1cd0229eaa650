//! Builders for structured QR payloads (Wi-Fi, contact card, URL).

use serde::{Deserialize, Serialize};

/// Wi-Fi authentication type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WifiSecurity {
    /// WPA/WPA2/WPA3.
    #[default]
    Wpa,
    /// Legacy WEP.
    Wep,
    /// Open network.
    Nopass,
}

impl WifiSecurity {
    /// Tag used in the `T:` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wpa => "WPA",
            Self::Wep => "WEP",
            Self::Nopass => "nopass",
        }
    }
}

/// Network credentials scanned by phones to join Wi-Fi.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    /// Network name.
    pub ssid: String,
    /// Passphrase; ignored for open networks.
    #[serde(default)]
    pub password: String,
    /// Authentication type.
    #[serde(default)]
    pub security: WifiSecurity,
    /// Whether the SSID is hidden.
    #[serde(default)]
    pub hidden: bool,
}

impl WifiNetwork {
    /// `WIFI:T:..;S:..;P:..;H:..;;` payload.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let mut out = format!(
            "WIFI:T:{};S:{};",
            self.security.as_str(),
            escape_wifi(&self.ssid)
        );
        if self.security != WifiSecurity::Nopass {
            out.push_str(&format!("P:{};", escape_wifi(&self.password)));
        }
        out.push_str(if self.hidden { "H:true;;" } else { "H:false;;" });
        out
    }
}

fn escape_wifi(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ';' | ',' | ':' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Contact details encoded as a vCard 3.0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    /// Full name.
    pub name: String,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Organization.
    #[serde(default)]
    pub organization: String,
}

impl ContactCard {
    /// vCard text; empty optional fields are left out.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let mut lines = vec![
            "BEGIN:VCARD".to_string(),
            "VERSION:3.0".to_string(),
            format!("FN:{}", self.name.trim()),
        ];
        for (tag, value) in [
            ("TEL", &self.phone),
            ("EMAIL", &self.email),
            ("ORG", &self.organization),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                lines.push(format!("{tag}:{value}"));
            }
        }
        lines.push("END:VCARD".to_string());
        lines.join("\n")
    }
}

/// URL payload; bare hosts get an `https://` scheme.
#[must_use]
pub fn url_payload(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
