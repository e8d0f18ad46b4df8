fn main() -> std::process::ExitCode {
    pushdeploy_lib::run()
}
