//! Registry of known header keywords.
//!
//! Every keyword the editor understands is a variant of [`Keyword`] and all of
//! its metadata (expected value type, uniqueness, physical unit, membership in
//! an indexed family such as `NAXISn`) comes from `match` tables on that enum.
//! A card's actual keyword is a [`KeywordId`], which adds the family index
//! and the free-form `Custom` names.

use core::fmt;

use crate::block::KEYWORD_SIZE;

/// Value type a keyword expects on its card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Logical,
    Int,
    Real,
    Literal,
    /// Unregistered keyword; any value is accepted.
    Custom,
    /// Structural keyword carrying no `= value` field.
    None,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Logical => "LOGICAL",
            ValueType::Int => "INT",
            ValueType::Real => "REAL",
            ValueType::Literal => "LITERAL",
            ValueType::Custom => "CUSTOM",
            ValueType::None => "NONE",
        };
        f.write_str(s)
    }
}

/// How many digits an indexed family accepts after its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexDigits {
    /// One or more digits, limited by the keyword field width.
    Many,
    /// Exactly one digit.
    One,
}

macro_rules! keywords {
    ($($variant:ident => $name:literal,)*) => {
        /// The closed set of known keywords.
        ///
        /// Indexed families (`NaxisN`, `CrpixN`, ...) stand for every member
        /// of the family; the member index lives in [`KeywordId::Indexed`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Every known keyword in registry order.
            pub const ALL: &'static [Keyword] = &[$(Keyword::$variant,)*];

            /// Keyword name as written in a header. Families end in `n`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $name,)*
                }
            }
        }
    };
}

keywords! {
    Simple => "SIMPLE",
    Bitpix => "BITPIX",
    Naxis => "NAXIS",
    NaxisN => "NAXISn",
    Extend => "EXTEND",
    Bscale => "BSCALE",
    Bzero => "BZERO",
    Bunit => "BUNIT",
    Pedestal => "PEDESTAL",
    Datamin => "DATAMIN",
    Datamax => "DATAMAX",
    Blank => "BLANK",
    Sitename => "SITENAME",
    Sitealt => "SITEALT",
    Sitelat => "SITELAT",
    Sitelong => "SITELONG",
    Timezone => "TIMEZONE",
    Telescop => "TELESCOP",
    Telfocus => "TELFOCUS",
    Teldiam => "TELDIAM",
    Telfrat => "TELFRAT",
    Instrume => "INSTRUME",
    Ccdabg => "CCDABG",
    Ccdfwc => "CCDFWC",
    Ccdegain => "CCDEGAIN",
    Ccdrnois => "CCDRNOIS",
    Ccdrtime => "CCDRTIME",
    CcdsizeN => "CCDSIZEn",
    PixsizeN => "PIXSIZEn",
    PixscalN => "PIXSCALn",
    BiassecN => "BIASSECn",
    Program => "PROGRAM",
    Origin => "ORIGIN",
    Owner => "OWNER",
    Observer => "OBSERVER",
    Datasec => "DATASEC",
    BinningN => "BINNINGn",
    TempSet => "TEMP-SET",
    TempCcd => "TEMP-CCD",
    TempOut => "TEMP-OUT",
    Timesys => "TIMESYS",
    DateObs => "DATE-OBS",
    Imagetyp => "IMAGETYP",
    Exptime => "EXPTIME",
    Filter => "FILTER",
    Flipstat => "FLIPSTAT",
    Mountdec => "MOUNTDEC",
    Mountra => "MOUNTRA",
    Notes => "NOTES",
    Object => "OBJECT",
    Catname => "CATNAME",
    Wdec => "WDEC",
    Wra => "WRA",
    Wepoch => "WEPOCH",
    CrpixN => "CRPIXn",
    CrvalN => "CRVALn",
    Dec => "DEC",
    Ra => "RA",
    Epoch => "EPOCH",
    Equinox => "EQUINOX",
    Radecsys => "RADECSYS",
    CtypeN => "CTYPEn",
    CdeltN => "CDELTn",
    CrotaN => "CROTAn",
    Cd11 => "CD1_1",
    Cd12 => "CD1_2",
    Cd21 => "CD2_1",
    Cd22 => "CD2_2",
    Secpix => "SECPIX",
    Wcssep => "WCSSEP",
    Wcsrfcat => "WCSRFCAT",
    Wcsimcat => "WCSIMCAT",
    Wcsmatch => "WCSMATCH",
    Wcsnref => "WCSNREF",
    Wcstol => "WCSTOL",
    Imwcs => "IMWCS",
    Xtension => "XTENSION",
    Pcount => "PCOUNT",
    Gcount => "GCOUNT",
    Extname => "EXTNAME",
    Date => "DATE",
    Comment => "COMMENT",
    History => "HISTORY",
    Continue => "CONTINUE",
    Empty => "",
    End => "END",
}

impl Keyword {
    /// Expected value type of the keyword's cards.
    pub const fn value_type(self) -> ValueType {
        use Keyword::*;
        match self {
            Simple | Extend | Ccdabg => ValueType::Logical,
            Bitpix | Naxis | NaxisN | Pedestal | Blank | Pcount | Gcount => ValueType::Int,
            Bscale | Bzero | Datamin | Datamax | Sitealt | Sitelat | Sitelong | Timezone
            | Telfocus | Teldiam | Ccdfwc | Ccdegain | Ccdrnois | Ccdrtime | CcdsizeN
            | PixsizeN | PixscalN | BinningN | TempSet | TempCcd | TempOut | Exptime
            | Mountdec | Mountra | Wepoch | CrpixN | CrvalN | Epoch | Equinox | CdeltN
            | CrotaN | Cd11 | Cd12 | Cd21 | Cd22 | Secpix | Wcssep | Wcsmatch | Wcsnref
            | Wcstol => ValueType::Real,
            Bunit | Sitename | Telescop | Telfrat | Instrume | BiassecN | Program | Origin
            | Owner | Observer | Datasec | Timesys | DateObs | Imagetyp | Filter | Flipstat
            | Notes | Object | Catname | Wdec | Wra | Dec | Ra | Radecsys | CtypeN
            | Wcsrfcat | Wcsimcat | Imwcs | Xtension | Extname | Date => ValueType::Literal,
            Comment | History | Continue | Empty | End => ValueType::None,
        }
    }

    /// True for families such as `NAXISn` whose members carry an index.
    pub const fn is_indexed(self) -> bool {
        self.index_digits().is_some()
    }

    /// True if the family index is bounded by the header's NAXIS value.
    pub const fn is_bounded_by_naxis(self) -> bool {
        self.is_indexed() && !matches!(self, Keyword::BiassecN)
    }

    /// True if the keyword may occur at most once per header.
    pub const fn is_unique(self) -> bool {
        !matches!(
            self,
            Keyword::Empty | Keyword::Comment | Keyword::History | Keyword::Continue
        )
    }

    /// True if the keyword's value has a physical unit, documented in the
    /// card comment.
    pub const fn has_unit(self) -> bool {
        use Keyword::*;
        matches!(
            self,
            Pedestal
                | Datamin
                | Datamax
                | Sitealt
                | Sitelat
                | Sitelong
                | Timezone
                | Teldiam
                | Telfocus
                | Ccdfwc
                | Ccdegain
                | Ccdrnois
                | Ccdrtime
                | PixsizeN
                | PixscalN
                | TempSet
                | TempCcd
                | TempOut
                | Exptime
                | Mountdec
                | Mountra
                | CrpixN
                | CrvalN
                | CdeltN
                | CrotaN
                | Secpix
                | Wcssep
                | Wcstol
        )
    }

    /// Name of a family without the trailing `n`.
    pub fn family_prefix(self) -> Option<&'static str> {
        if self.is_indexed() {
            let name = self.name();
            Some(&name[..name.len() - 1])
        } else {
            None
        }
    }

    const fn index_digits(self) -> Option<IndexDigits> {
        use Keyword::*;
        match self {
            NaxisN | CrpixN | CrvalN | CtypeN | CdeltN | CrotaN => Some(IndexDigits::Many),
            CcdsizeN | PixsizeN | PixscalN | BiassecN | BinningN => Some(IndexDigits::One),
            _ => None,
        }
    }

    /// Finds a non-family keyword by its header name.
    fn from_name(name: &str) -> Option<Keyword> {
        Keyword::ALL
            .iter()
            .copied()
            .find(|k| !k.is_indexed() && *k != Keyword::Empty && k.name() == name)
    }
}

/// Identity of a card's keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeywordId {
    /// A registered, non-indexed keyword.
    Known(Keyword),
    /// A member of an indexed family, e.g. `NAXIS2`.
    Indexed(Keyword, u32),
    /// Any other name. Validation decides whether the name is legal.
    Custom(String),
}

impl KeywordId {
    /// Classifies a keyword token.
    ///
    /// Trailing spaces are ignored and a blank token is the blank keyword.
    /// Registered names win, then the indexed family patterns (`NAXIS` plus
    /// digits, `CCDSIZE` plus one digit, ...), and anything else is custom.
    pub fn parse(token: &str) -> KeywordId {
        let name = token.trim_end_matches(' ');
        if name.is_empty() {
            return KeywordId::Known(Keyword::Empty);
        }
        if let Some(keyword) = Keyword::from_name(name) {
            return KeywordId::Known(keyword);
        }
        if let Some((family, index)) = match_family(name) {
            return KeywordId::Indexed(family, index);
        }
        KeywordId::Custom(name.to_string())
    }

    /// Classifies the keyword field of a raw card.
    pub fn from_card(card: &[u8]) -> KeywordId {
        let field = &card[..KEYWORD_SIZE.min(card.len())];
        let token: String = field.iter().map(|&b| b as char).collect();
        KeywordId::parse(&token)
    }

    /// The registered keyword, if any.
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            KeywordId::Known(k) | KeywordId::Indexed(k, _) => Some(*k),
            KeywordId::Custom(_) => None,
        }
    }

    /// Index of a family member.
    pub fn index(&self) -> Option<u32> {
        match self {
            KeywordId::Indexed(_, n) => Some(*n),
            _ => None,
        }
    }

    /// True if this is the given registered keyword or family.
    pub fn is(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, KeywordId::Custom(_))
    }

    /// Name as written in the keyword field, without padding.
    pub fn name(&self) -> String {
        match self {
            KeywordId::Known(k) => k.name().to_string(),
            KeywordId::Indexed(k, n) => {
                format!("{}{}", k.family_prefix().unwrap_or_default(), n)
            }
            KeywordId::Custom(name) => name.clone(),
        }
    }

    /// Full registry metadata for this keyword.
    pub fn info(&self) -> KeywordInfo {
        match self.keyword() {
            Some(k) => KeywordInfo {
                value_type: k.value_type(),
                indexed: k.is_indexed(),
                unique: k.is_unique(),
                unit: k.has_unit(),
            },
            None => KeywordInfo {
                value_type: ValueType::Custom,
                indexed: false,
                unique: true,
                unit: false,
            },
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.info().value_type
    }

    pub fn is_unique(&self) -> bool {
        self.info().unique
    }
}

impl From<Keyword> for KeywordId {
    fn from(keyword: Keyword) -> Self {
        KeywordId::Known(keyword)
    }
}

impl fmt::Display for KeywordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Registry answer for one keyword token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordInfo {
    pub value_type: ValueType,
    pub indexed: bool,
    pub unique: bool,
    pub unit: bool,
}

/// Looks up the registry metadata of a keyword token.
pub fn lookup(token: &str) -> KeywordInfo {
    KeywordId::parse(token).info()
}

fn match_family(name: &str) -> Option<(Keyword, u32)> {
    if name.len() > KEYWORD_SIZE {
        return None;
    }
    Keyword::ALL.iter().copied().find_map(|family| {
        let digits = name.strip_prefix(family.family_prefix()?)?;
        let accepted = match family.index_digits()? {
            IndexDigits::Many => !digits.is_empty(),
            IndexDigits::One => digits.len() == 1,
        };
        if accepted && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some((family, digits.parse().ok()?))
        } else {
            None
        }
    })
}

// ── Image types ──

/// Observation classification taken from the `IMAGETYP` card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    #[default]
    Unknown,
    LightFrame,
    FlatField,
    DarkFrame,
    BiasFrame,
    Object,
}

const BASIC_MANDATORY: &[Keyword] = &[
    Keyword::Simple,
    Keyword::Bitpix,
    Keyword::Naxis,
    Keyword::End,
];

const CALIBRATION_MANDATORY: &[Keyword] = &[
    Keyword::Simple,
    Keyword::Bitpix,
    Keyword::Naxis,
    Keyword::Extend,
    Keyword::Bscale,
    Keyword::Bzero,
    Keyword::Bunit,
    Keyword::Sitename,
    Keyword::Sitealt,
    Keyword::Sitelat,
    Keyword::Sitelong,
    Keyword::Timezone,
    Keyword::Telescop,
    Keyword::Telfocus,
    Keyword::Teldiam,
    Keyword::Telfrat,
    Keyword::Instrume,
    Keyword::Ccdabg,
    Keyword::Ccdegain,
    Keyword::Ccdrnois,
    Keyword::Ccdrtime,
    Keyword::Owner,
    Keyword::Timesys,
    Keyword::DateObs,
    Keyword::Imagetyp,
    Keyword::Exptime,
];

const FLAT_EXTRA: &[Keyword] = &[Keyword::Filter];

const LIGHT_EXTRA: &[Keyword] = &[
    Keyword::Filter,
    Keyword::Object,
    Keyword::Catname,
    Keyword::Wdec,
    Keyword::Wra,
    Keyword::Wepoch,
    Keyword::Dec,
    Keyword::Ra,
    Keyword::Epoch,
    Keyword::Equinox,
    Keyword::Radecsys,
    Keyword::Cd11,
    Keyword::Cd12,
    Keyword::Cd21,
    Keyword::Cd22,
    Keyword::Secpix,
    Keyword::Wcssep,
    Keyword::Wcsrfcat,
    Keyword::Wcsimcat,
    Keyword::Wcsmatch,
    Keyword::Wcsnref,
    Keyword::Wcstol,
    Keyword::Imwcs,
];

impl ImageType {
    pub const ALL: [ImageType; 6] = [
        ImageType::Unknown,
        ImageType::LightFrame,
        ImageType::FlatField,
        ImageType::DarkFrame,
        ImageType::BiasFrame,
        ImageType::Object,
    ];

    /// Name used in `IMAGETYP` values, e.g. `LIGHT_FRAME`.
    pub const fn name(self) -> &'static str {
        match self {
            ImageType::Unknown => "UNKNOWN",
            ImageType::LightFrame => "LIGHT_FRAME",
            ImageType::FlatField => "FLAT_FIELD",
            ImageType::DarkFrame => "DARK_FRAME",
            ImageType::BiasFrame => "BIAS_FRAME",
            ImageType::Object => "OBJECT",
        }
    }

    /// Interprets an `IMAGETYP` value. Spaces count as underscores and case
    /// is ignored; anything unrecognized is `Unknown`.
    pub fn from_value(value: &str) -> ImageType {
        let normalized = value.replace(' ', "_").to_uppercase();
        ImageType::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .unwrap_or_default()
    }

    /// Keywords a complete header of this type must contain.
    pub fn mandatory_keywords(self) -> Vec<Keyword> {
        match self {
            ImageType::Unknown | ImageType::Object => BASIC_MANDATORY.to_vec(),
            ImageType::DarkFrame | ImageType::BiasFrame => CALIBRATION_MANDATORY.to_vec(),
            ImageType::FlatField => [CALIBRATION_MANDATORY, FLAT_EXTRA].concat(),
            ImageType::LightFrame => [CALIBRATION_MANDATORY, LIGHT_EXTRA].concat(),
        }
    }

    /// Indexed families a complete header of this type must contain.
    pub fn mandatory_families(self) -> &'static [Keyword] {
        use Keyword::*;
        match self {
            ImageType::Unknown | ImageType::Object => &[NaxisN],
            ImageType::LightFrame => &[
                NaxisN, CcdsizeN, PixsizeN, PixscalN, BinningN, CrpixN, CrvalN, CtypeN, CdeltN,
                CrotaN,
            ],
            ImageType::FlatField => &[NaxisN, CcdsizeN, PixsizeN, PixscalN, BinningN],
            ImageType::DarkFrame | ImageType::BiasFrame => &[NaxisN, CcdsizeN, PixsizeN, BinningN],
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
