/// Full-Kelly sizing for a single outcome token.
///
///   f* = (b·p − q) / b,  b = 1/price − 1,  q = 1 − p
///
/// `price` is what one share costs (0.0–1.0) and pays 1.0 if the outcome
/// resolves true. Returns the fraction of the stake budget to commit,
/// `0.0` when there is no edge or the price is degenerate.
pub fn kelly_fraction(win_prob: f64, price: f64) -> f64 {
    if !(0.0..=1.0).contains(&win_prob) || price <= 0.0 || price >= 1.0 {
        return 0.0;
    }

    let b = (1.0 / price) - 1.0;
    let f = (b * win_prob - (1.0 - win_prob)) / b;
    f.clamp(0.0, 1.0)
}

/// Expected return per unit staked: `win_prob / price − 1`.
pub fn edge(win_prob: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    win_prob / price - 1.0
}
