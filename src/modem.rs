/// Fixed per-direction radio characteristics of a node's modem.
#[derive(Debug, Clone)]
pub struct Modem {
    id: &'static str,
    rx_rf_power_w: f64,
    rx_rate_bits_per_s: u64,
    rx_omega_rad_per_s: f64,
    rx_lambda_m: f64,
    rx_consumed_power_w: f64,
    tx_rf_power_w: f64,
    tx_rate_bits_per_s: u64,
    tx_omega_rad_per_s: f64,
    tx_lambda_m: f64,
    tx_consumed_power_w: f64,
}

impl Modem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &'static str,
        rx_rf_power_w: f64,
        rx_rate_bits_per_s: u64,
        rx_omega_rad_per_s: f64,
        rx_lambda_m: f64,
        rx_consumed_power_w: f64,
        tx_rf_power_w: f64,
        tx_rate_bits_per_s: u64,
        tx_omega_rad_per_s: f64,
        tx_lambda_m: f64,
        tx_consumed_power_w: f64,
    ) -> Self {
        Self {
            id,
            rx_rf_power_w,
            rx_rate_bits_per_s,
            rx_omega_rad_per_s,
            rx_lambda_m,
            rx_consumed_power_w,
            tx_rf_power_w,
            tx_rate_bits_per_s,
            tx_omega_rad_per_s,
            tx_lambda_m,
            tx_consumed_power_w,
        }
    }

    /// Deployed UHF crosslink modem (450 MHz up, 460 MHz down).
    pub fn uhf_deploy() -> Self {
        Self::new(
            "CadetDeploy",
            0.0,
            9600,
            2_827_433_388.230_814,
            0.666_204_899_5,
            0.3,
            2.0,
            9600,
            2_890_265_241.302_609_4,
            0.651_722_184_29,
            12.0,
        )
    }

    /// Ground-station UHF modem.
    pub fn uhf_station() -> Self {
        Self::new(
            "CadetStation",
            0.0,
            9600,
            2_827_433_388.230_814,
            0.666_204_899_5,
            0.3,
            2.0,
            3_000_000,
            2_890_265_241.302_609_4,
            0.651_722_184_29,
            12.0,
        )
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn rx_rf_power_w(&self) -> f64 {
        self.rx_rf_power_w
    }

    pub fn rx_rate_bits_per_s(&self) -> u64 {
        self.rx_rate_bits_per_s
    }

    pub fn rx_omega_rad_per_s(&self) -> f64 {
        self.rx_omega_rad_per_s
    }

    pub fn rx_lambda_m(&self) -> f64 {
        self.rx_lambda_m
    }

    pub fn rx_consumed_power_w(&self) -> f64 {
        self.rx_consumed_power_w
    }

    pub fn tx_rf_power_w(&self) -> f64 {
        self.tx_rf_power_w
    }

    pub fn tx_rate_bits_per_s(&self) -> u64 {
        self.tx_rate_bits_per_s
    }

    pub fn tx_omega_rad_per_s(&self) -> f64 {
        self.tx_omega_rad_per_s
    }

    pub fn tx_lambda_m(&self) -> f64 {
        self.tx_lambda_m
    }

    pub fn tx_consumed_power_w(&self) -> f64 {
        self.tx_consumed_power_w
    }
}
