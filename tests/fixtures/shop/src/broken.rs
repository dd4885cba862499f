pub fn half_written( {
