/// Decoded NAL header byte.
///
/// Only `nal_type` drives control flow. The forbidden bit and `nal_ref_idc`
/// are kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    pub raw: u8,
    pub forbidden_zero_bit: u8,
    pub nal_ref_idc: u8,
    pub nal_type: u8,
}

impl NalHeader {
    pub fn new(raw: u8) -> Self {
        Self {
            raw,
            forbidden_zero_bit: (raw & 0x80) >> 7,
            nal_ref_idc: (raw & 0x60) >> 5,
            nal_type: raw & 0x1F,
        }
    }

    pub fn unit_type(&self) -> NALUnitType {
        NALUnitType::from(self.nal_type)
    }

    /// SEI, SPS and PPS configure decoding rather than carry frame content.
    pub fn is_header(&self) -> bool {
        matches!(self.nal_type, 6..=8)
    }

    pub fn is_keyframe(&self) -> bool {
        self.nal_type == 5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    Unspecified = 0,
    CodedSliceNonIDR = 1,
    CodedSliceDataPartitionA = 2,
    CodedSliceDataPartitionB = 3,
    CodedSliceDataPartitionC = 4,
    CodedSliceIDR = 5,
    SEI = 6,
    SPS = 7,
    PPS = 8,
    AccessUnitDelimiter = 9,
    EndOfSequence = 10,
    EndOfStream = 11,
    FillerData = 12,
}

impl NALUnitType {
    /// Short name used in diagnostics for the header roles.
    pub fn header_name(&self) -> Option<&'static str> {
        match self {
            NALUnitType::SEI => Some("SEI"),
            NALUnitType::SPS => Some("SPS"),
            NALUnitType::PPS => Some("PPS"),
            _ => None,
        }
    }
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            _ => NALUnitType::Unspecified,
        }
    }
}
