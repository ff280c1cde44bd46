fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_files = &[
        "../../proto/relation/v1/relation.proto",
        "../../proto/user/v1/user.proto",
    ];

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(proto_files, &["../../proto"])?;

    Ok(())
}
