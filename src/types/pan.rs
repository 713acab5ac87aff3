//! PAN descriptor returned by an active scan.

/// A PAN found by `SKSCAN`.
///
/// Only constructed once every field has been seen; see [`PanBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanDescriptor {
    /// Logical channel number (hex).
    pub channel: String,
    /// Channel page (hex).
    pub channel_page: String,
    /// PAN identifier (hex).
    pub pan_id: String,
    /// 64-bit MAC address of the coordinator (hex).
    pub addr: String,
    /// Link quality indicator of the received beacon (hex).
    pub lqi: String,
    /// Pairing id, the low 8 digits of the route B id.
    pub pair_id: String,
}

/// Field label as printed by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanField {
    Channel,
    ChannelPage,
    PanId,
    Addr,
    Lqi,
    PairId,
}

impl PanField {
    /// All labels in the order the adapter prints them.
    pub const ALL: [Self; 6] = [
        Self::Channel,
        Self::ChannelPage,
        Self::PanId,
        Self::Addr,
        Self::Lqi,
        Self::PairId,
    ];

    /// Returns the label text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Channel => "Channel",
            Self::ChannelPage => "Channel Page",
            Self::PanId => "Pan ID",
            Self::Addr => "Addr",
            Self::Lqi => "LQI",
            Self::PairId => "PairID",
        }
    }

    /// Looks up a field by its exact label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.label() == label)
    }
}

/// Accumulates scan fields until the descriptor is complete.
#[derive(Debug, Clone, Default)]
pub struct PanBuilder {
    fields: [Option<String>; 6],
}

impl PanBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a field value. Later values replace earlier ones; empty
    /// values are ignored.
    pub fn set(&mut self, field: PanField, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.fields[field as usize] = Some(value.to_owned());
        }
    }

    /// Returns the labels that have not been seen yet.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        PanField::ALL
            .into_iter()
            .filter(|field| self.fields[*field as usize].is_none())
            .map(PanField::label)
            .collect()
    }

    /// Builds the descriptor, or returns the missing labels.
    pub fn build(self) -> Result<PanDescriptor, Vec<&'static str>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(missing);
        }
        let [
            Some(channel),
            Some(channel_page),
            Some(pan_id),
            Some(addr),
            Some(lqi),
            Some(pair_id),
        ] = self.fields
        else {
            return Err(missing);
        };
        Ok(PanDescriptor {
            channel,
            channel_page,
            pan_id,
            addr,
            lqi,
            pair_id,
        })
    }
}
