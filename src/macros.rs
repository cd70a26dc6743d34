/// Times `$code` with the given prometheus histogram and yields its value.
#[macro_export]
macro_rules! measure {
    ($metric:expr, $code:block) => {{
        let timer = $metric.start_timer();
        let result = $code;
        timer.observe_duration();
        result
    }};
}
