//! Embedded network reference data.
//!
//! The canonical station table ships with the binary: it changes on the
//! timescale of network construction, not of deployments. Codes are
//! line-prefix + ordinal; a transfer station appears once per line it
//! serves (e.g. 台北車站 is both BL12 and R10).

/// (station code, display name) for the served network.
pub const NETWORK: &[(&str, &str)] = &[
    // Blue line (high capacity, train-numbered)
    ("BL05", "亞東醫院"),
    ("BL07", "府中"),
    ("BL08", "江子翠"),
    ("BL10", "龍山寺"),
    ("BL11", "西門"),
    ("BL12", "台北車站"),
    ("BL13", "善導寺"),
    ("BL14", "忠孝新生"),
    ("BL15", "忠孝復興"),
    ("BL17", "國父紀念館"),
    ("BL18", "市政府"),
    ("BL23", "南港展覽館"),
    // Red line (high capacity, train-numbered)
    ("R02", "象山"),
    ("R03", "台北101/世貿"),
    ("R04", "信義安和"),
    ("R05", "大安"),
    ("R07", "東門"),
    ("R08", "中正紀念堂"),
    ("R10", "台北車站"),
    ("R11", "中山"),
    ("R13", "民權西路"),
    ("R15", "劍潭"),
    // Green line (high capacity, train-numbered)
    ("G01", "新店"),
    ("G04", "大坪林"),
    ("G09", "古亭"),
    ("G12", "西門"),
    // Orange line (high capacity, train-numbered)
    ("O01", "南勢角"),
    ("O04", "頂溪"),
    ("O06", "東門"),
    ("O11", "民權西路"),
    // Brown line (driverless, direction-keyed crowding, no train numbers)
    ("BR01", "動物園"),
    ("BR02", "木柵"),
    ("BR04", "萬芳醫院"),
    ("BR07", "六張犁"),
    ("BR08", "科技大樓"),
    ("BR09", "大安"),
    ("BR10", "忠孝復興"),
    ("BR11", "南京復興"),
    ("BR13", "中山國中"),
    ("BR24", "南港展覽館"),
];
